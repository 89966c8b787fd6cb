/// Shared types used across the codebase

use serde::Serialize;

use crate::config::ApiConfig;

/// A TEXT column held a value outside the enum's known set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declare an enum stored as TEXT in Postgres and as a snake_case string in JSON
///
/// Generates `as_str`, `ALL`, `FromStr`, `TryFrom<String>` (for `#[sqlx(try_from = "String")]`)
/// and `Display`.
#[macro_export]
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::types::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::types::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::types::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Resolved pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    /// Clamp client-supplied paging to the configured bounds (pages start at 1)
    pub fn new(page: Option<i64>, limit: Option<i64>, api: &ApiConfig) -> Self {
        let limit = limit
            .unwrap_or(api.default_page_size)
            .clamp(1, api.max_page_size.max(1));
        // Keep `page * limit` inside i64 so the offset never overflows
        let page = page.unwrap_or(1).clamp(1, i64::MAX / limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// One page of a listing plus totals for the client pager
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        let pages = if total == 0 { 0 } else { (total + page.limit - 1) / page.limit };
        Self {
            items,
            total,
            page: page.page,
            limit: page.limit,
            pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::text_enum! {
        pub enum Colour { Red => "red", DarkBlue => "dark_blue" }
    }

    fn api() -> ApiConfig {
        ApiConfig {
            default_page_size: 20,
            max_page_size: 50,
        }
    }

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(Page::new(None, None, &api()), Page { page: 1, limit: 20 });
        assert_eq!(Page::new(Some(0), Some(500), &api()), Page { page: 1, limit: 50 });
        assert_eq!(Page::new(Some(3), Some(-4), &api()), Page { page: 3, limit: 1 });
        assert_eq!(Page::new(Some(3), Some(10), &api()).offset(), 20);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let page = Page::new(Some(i64::MAX), Some(50), &api());
        assert_eq!(page.page, i64::MAX / 50);
        assert!(page.offset() > 0);

        let page = Page::new(Some(i64::MAX), None, &api());
        assert!(page.offset() <= i64::MAX - 20);

        let listing: Paginated<u8> = Paginated::new(vec![], 7, page);
        assert_eq!(listing.pages, 1);
    }

    #[test]
    fn paginated_counts_pages() {
        let page = Page { page: 1, limit: 10 };
        assert_eq!(Paginated::new(vec![1], 21, page).pages, 3);
        assert_eq!(Paginated::<i32>::new(vec![], 0, page).pages, 0);
    }

    #[test]
    fn text_enum_round_trips_names() {
        assert_eq!("dark_blue".parse::<Colour>(), Ok(Colour::DarkBlue));
        assert_eq!(Colour::Red.to_string(), "red");
        assert_eq!(serde_json::to_value(Colour::DarkBlue).unwrap(), "dark_blue");
        let err = Colour::try_from("green".to_string()).unwrap_err();
        assert_eq!(err.kind, "Colour");
    }
}
