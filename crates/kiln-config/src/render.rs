//! Human-readable rendering of the configuration record.

use std::io::{self, Write};

use crate::Config;

/// First line written by [`Config::render`].
pub const CONFIGURATION_HEADING: &str = "Server configuration:";

/// Placeholder printed for unset fields.
pub const UNSET_SENTINEL: &str = "off";

impl Config {
    /// Writes every field as an indented `name: value` line.
    ///
    /// Unset fields print as [`UNSET_SENTINEL`]. Only writer failures are
    /// reported; a fully defaulted record always renders.
    ///
    /// # Errors
    ///
    /// Returns the error raised by `writer`.
    pub fn render<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{CONFIGURATION_HEADING}")?;
        for (name, value) in self.attributes() {
            let value = value.as_deref().unwrap_or(UNSET_SENTINEL);
            writeln!(writer, "  {name}: {value}")?;
        }
        writer.flush()
    }
}
