//! Command definitions for the SSD1680 e-paper controller

/// Display commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(clippy::upper_case_acronyms)]
pub enum Command {
    /// Driver Output Control (gate count, scan direction)
    DriverOutput = 0x01,
    /// Deep Sleep Mode
    DeepSleep = 0x10,
    /// Data Entry Mode (RAM address increment direction)
    DataEntryMode = 0x11,
    /// Software Reset
    SwReset = 0x12,
    /// Temperature Sensor Control
    TempSensor = 0x18,
    /// Master Activation (start update sequence)
    MasterActivate = 0x20,
    /// Display Update Control 2 (update sequence selection)
    UpdateControl2 = 0x22,
    /// Write RAM (black/white)
    WriteRamBw = 0x24,
    /// Write RAM (red)
    WriteRamRed = 0x26,
    /// Border Waveform Control
    BorderWaveform = 0x3C,
    /// Set RAM X start/end
    RamXRange = 0x44,
    /// Set RAM Y start/end
    RamYRange = 0x45,
    /// Set RAM X address counter
    RamXCounter = 0x4E,
    /// Set RAM Y address counter
    RamYCounter = 0x4F,
}

impl Command {
    /// Get the command address byte
    #[inline]
    pub fn addr(self) -> u8 {
        self as u8
    }
}
