pub mod export;
pub mod text;
pub mod time;

pub use export::{write_history_csv, write_history_json};
pub use text::render_table;
pub use time::{current_human_timestamp, format_bar_time, parse_anchor};
