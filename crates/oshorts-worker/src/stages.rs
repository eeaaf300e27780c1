//! Pipeline stage table.
//!
//! Five ordered stages with the progress percentage and label written to
//! the job record on entry. Completion is written separately at 100%.

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Downloading,
    Transcribing,
    Analyzing,
    CreatingClips,
    Finalizing,
}

impl Stage {
    pub const ALL: &'static [Stage] = &[
        Stage::Downloading,
        Stage::Transcribing,
        Stage::Analyzing,
        Stage::CreatingClips,
        Stage::Finalizing,
    ];

    /// Progress percentage written when the stage starts.
    pub fn percent(&self) -> u8 {
        match self {
            Stage::Downloading => 10,
            Stage::Transcribing => 30,
            Stage::Analyzing => 50,
            Stage::CreatingClips => 70,
            Stage::Finalizing => 90,
        }
    }

    /// Stage label shown to pollers.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Downloading => "Downloading video",
            Stage::Transcribing => "Transcribing audio",
            Stage::Analyzing => "AI analysis",
            Stage::CreatingClips => "Creating clips",
            Stage::Finalizing => "Finalizing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_percentages_are_ordered() {
        let percents: Vec<u8> = Stage::ALL.iter().map(|s| s.percent()).collect();
        assert_eq!(percents, vec![10, 30, 50, 70, 90]);
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
    }
}
