//! Field Value Module
//!
//! Text conversions for the scalar and enumeration field shapes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

// == Field Value ==
/// A value stored as the natural text form of one hash field.
///
/// `to_field` returns None for a null value, which omits the field entirely.
/// `from_field` receives a non-blank text and reports parse failures as a
/// message.
pub trait FieldValue: Sized {
    fn to_field(&self) -> Option<String>;

    fn from_field(text: &str) -> Result<Self, String>;
}

macro_rules! display_from_str_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn to_field(&self) -> Option<String> {
                    Some(self.to_string())
                }

                fn from_field(text: &str) -> Result<Self, String> {
                    text.trim().parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )*
    };
}

display_from_str_field!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char);

impl FieldValue for String {
    fn to_field(&self) -> Option<String> {
        Some(self.clone())
    }

    fn from_field(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }
}

impl FieldValue for bool {
    fn to_field(&self) -> Option<String> {
        Some(self.to_string())
    }

    // Accepts "True"/"False" as written by other clients
    fn from_field(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if text.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(format!("'{}' is not a valid boolean", text))
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn to_field(&self) -> Option<String> {
        Some(self.to_rfc3339())
    }

    fn from_field(text: &str) -> Result<Self, String> {
        DateTime::parse_from_rfc3339(text.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| e.to_string())
    }
}

impl FieldValue for NaiveDateTime {
    fn to_field(&self) -> Option<String> {
        Some(self.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }

    fn from_field(text: &str) -> Result<Self, String> {
        text.trim()
            .parse::<NaiveDateTime>()
            .map_err(|e| e.to_string())
    }
}

impl FieldValue for NaiveDate {
    fn to_field(&self) -> Option<String> {
        Some(self.format("%Y-%m-%d").to_string())
    }

    fn from_field(text: &str) -> Result<Self, String> {
        text.trim().parse::<NaiveDate>().map_err(|e| e.to_string())
    }
}

/// Nullable wrapper: None is omitted, a present text parses as the inner type.
impl<V: FieldValue> FieldValue for Option<V> {
    fn to_field(&self) -> Option<String> {
        self.as_ref().and_then(V::to_field)
    }

    fn from_field(text: &str) -> Result<Self, String> {
        V::from_field(text).map(Some)
    }
}

/// Values stored verbatim by [`SchemaBuilder::text`](super::SchemaBuilder::text).
pub trait TextField: FieldValue {}

impl TextField for String {}

impl TextField for Option<String> {}

// == Enumeration ==
/// An enumeration stored by member name.
///
/// ```ignore
/// #[derive(Clone, Copy, PartialEq, Default)]
/// enum Status { #[default] Active, Suspended }
///
/// impl EnumField for Status {
///     const MEMBERS: &'static [(&'static str, Self)] =
///         &[("Active", Status::Active), ("Suspended", Status::Suspended)];
/// }
/// ```
pub trait EnumField: Copy + PartialEq + 'static {
    /// Every member paired with its stored name
    const MEMBERS: &'static [(&'static str, Self)];

    fn member_name(&self) -> Option<&'static str> {
        Self::MEMBERS
            .iter()
            .find(|(_, member)| member == self)
            .map(|(name, _)| *name)
    }

    /// Matches a member by name, or by its position in `MEMBERS` when the text
    /// is numeric.
    fn parse_member(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if let Some((_, member)) = Self::MEMBERS.iter().find(|(name, _)| *name == text) {
            return Ok(*member);
        }
        text.parse::<usize>()
            .ok()
            .and_then(|index| Self::MEMBERS.get(index))
            .map(|(_, member)| *member)
            .ok_or_else(|| format!("'{}' is not a member of the enumeration", text))
    }
}
