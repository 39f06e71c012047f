//! Data models for the library server

pub mod book;
pub mod copy;
pub mod order;
pub mod page;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookFilter, BookInput};
pub use copy::{BookCopy, CopyStatus, NewBookCopy};
pub use order::{NewOrder, OrderDetails, OrderStatus, OrderTransition, OrderType, OrderView};
pub use page::{Page, PageRequest};
pub use stats::{BookStats, BookStatsView, ReportDashboard, UserStats};
pub use user::{NewUser, ReaderOrders, Role, User, UserChanges, UserClaims, UserStatus, UserSummary};

/// Implements the sqlx text column glue for an enum that provides
/// `as_str()` and `FromStr<Err = String>`.
macro_rules! impl_text_column {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use impl_text_column;

/// Joins the non-empty parts of an author's name with a single space
pub fn author_full_name(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_full_name() {
        assert_eq!(author_full_name(Some("Leo"), Some("Tolstoy")), "Leo Tolstoy");
        assert_eq!(author_full_name(None, Some("Homer")), "Homer");
        assert_eq!(author_full_name(Some(" "), None), "");
    }
}
