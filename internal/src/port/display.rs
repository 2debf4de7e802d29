/// Character-cell access to the monochrome display. Every call is blocking
/// bus I/O; implementations serialize access internally.
#[cfg_attr(test, mockall::automock)]
pub trait DisplayDrivenPort {
    fn clear(&self) -> anyhow::Result<()>;
    fn set_cursor(&self, x: u8, y: u8) -> anyhow::Result<()>;
    /// Writes `text` starting at `row`, truncating whatever does not fit.
    fn write(&self, row: u8, text: &str) -> anyhow::Result<()>;
    fn power(&self, on: bool) -> anyhow::Result<()>;
}
