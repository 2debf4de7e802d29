use crate::domain::reading::SensorReading;

#[cfg_attr(test, mockall::automock)]
pub trait SensorDrivenPort {
    /// Takes a fresh sample. Blocking bus I/O.
    fn read(&self) -> anyhow::Result<SensorReading>;
}
