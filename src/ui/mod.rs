pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, exercise_header, header, muted, section, success, warn};
pub use table::{exercise_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
