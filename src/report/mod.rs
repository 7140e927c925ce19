//! Rendering of records into user-facing text.

pub mod messages;
mod money;

pub use money::{
    LOCAL_OFFSET, format_date, format_money, format_signed_money, format_timestamp, local_now,
};
