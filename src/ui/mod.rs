// UI and formatting module

pub mod formatters;

// Re-export commonly used items for cleaner imports
pub use formatters::{
    format_notification, format_statistics, log_removal, print_banner, print_notification,
    print_rule, print_section, print_statistics, LoadLevel,
};
