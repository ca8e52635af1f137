use serde::Serialize;

use crate::booking::{Booking, ShiftType};

/// Combined shift styling for every booking on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftClass {
    Fullday,
    /// Morning and evening both taken.
    Mixed,
    Morning,
    Evening,
    #[default]
    None,
}

impl ShiftClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ShiftClass::Fullday => "fullday",
            ShiftClass::Mixed => "mixed",
            ShiftClass::Morning => "morning",
            ShiftClass::Evening => "evening",
            ShiftClass::None => "none",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ShiftClass::Fullday => "shift-fullday",
            ShiftClass::Mixed => "has-multiple-shifts",
            ShiftClass::Morning => "shift-morning",
            ShiftClass::Evening => "shift-evening",
            ShiftClass::None => "",
        }
    }
}

pub fn classify_shifts<I>(shifts: I) -> ShiftClass
where
    I: IntoIterator<Item = ShiftType>,
{
    let (mut morning, mut evening) = (false, false);
    for shift in shifts {
        match shift {
            ShiftType::Fullday => return ShiftClass::Fullday,
            ShiftType::Morning => morning = true,
            ShiftType::Evening => evening = true,
            ShiftType::None => {}
        }
    }

    match (morning, evening) {
        (true, true) => ShiftClass::Mixed,
        (true, false) => ShiftClass::Morning,
        (false, true) => ShiftClass::Evening,
        (false, false) => ShiftClass::None,
    }
}

pub fn classify<'a, I>(bookings: I) -> ShiftClass
where
    I: IntoIterator<Item = &'a Booking>,
{
    classify_shifts(bookings.into_iter().map(|booking| booking.shift_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::ShiftType::{Evening, Fullday, Morning, None};

    #[test]
    fn precedence_table() {
        assert_eq!(classify_shifts([]), ShiftClass::None);
        assert_eq!(classify_shifts([None, None]), ShiftClass::None);
        assert_eq!(classify_shifts([Morning]), ShiftClass::Morning);
        assert_eq!(classify_shifts([Morning, Morning, None]), ShiftClass::Morning);
        assert_eq!(classify_shifts([Evening]), ShiftClass::Evening);
        assert_eq!(classify_shifts([Morning, Evening]), ShiftClass::Mixed);
        assert_eq!(classify_shifts([Morning, Evening, Morning]), ShiftClass::Mixed);
        assert_eq!(classify_shifts([Morning, Evening, Fullday]), ShiftClass::Fullday);
        assert_eq!(classify_shifts([Fullday]), ShiftClass::Fullday);
    }

    #[test]
    fn order_does_not_matter() {
        let shifts = [Morning, None, Evening, Morning];
        let mut reversed = shifts;
        reversed.reverse();
        assert_eq!(classify_shifts(shifts), classify_shifts(reversed));

        let all = [Morning, Evening, Fullday, None];
        for rotation in 0..all.len() {
            let mut rotated = all;
            rotated.rotate_left(rotation);
            assert_eq!(classify_shifts(rotated), ShiftClass::Fullday);
        }
    }

    #[test]
    fn css_classes() {
        assert_eq!(ShiftClass::Mixed.css_class(), "has-multiple-shifts");
        assert_eq!(ShiftClass::None.css_class(), "");
        assert_eq!(ShiftClass::Fullday.as_str(), "fullday");
    }
}
