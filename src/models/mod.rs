mod devotional;
mod scripture;

pub use devotional::{
    Devotional, DevotionalFilter, DevotionalSource, ListQuery, NewDevotional, TodayDevotional,
};
pub use scripture::BibleVerse;
