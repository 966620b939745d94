pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, highlight, info, muted, status, success, summary_row, warn};
pub use table::{columns_table, rows_table, ColumnRow, TableBuilder};
pub use theme::{theme, ColorMode, Theme};
