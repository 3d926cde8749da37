use std::fmt;

/// How failures inside a stage propagate to the rest of the stage and process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultTolerance {
    /// Fail fast: any failure fails the stage and the whole process.
    #[default]
    None,
    /// Record failing items and keep going; the stage always completes.
    SkipItem,
    /// Like `SkipItem`, unless every attempted item failed, which fails the stage.
    SkipItemOutlier,
    /// A failing item ends the current stage; the process moves on.
    SkipStage,
}

impl FaultTolerance {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultTolerance::None => "NONE",
            FaultTolerance::SkipItem => "SKIP_ITEM",
            FaultTolerance::SkipItemOutlier => "SKIP_ITEM_OUTLIER",
            FaultTolerance::SkipStage => "SKIP_STAGE",
        }
    }

    /// Whether iteration continues with the next item after one failed.
    pub fn continues_after_item_failure(&self) -> bool {
        matches!(self, FaultTolerance::SkipItem | FaultTolerance::SkipItemOutlier)
    }

    /// Whether a failed stage takes the process down with it.
    pub fn fails_process(&self) -> bool {
        matches!(self, FaultTolerance::None)
    }

    /// Verdict for a stage that attempted `successes + failures` items.
    pub fn stage_succeeds(&self, successes: usize, failures: usize) -> bool {
        match self {
            FaultTolerance::SkipItem => true,
            FaultTolerance::SkipItemOutlier => failures == 0 || successes > 0,
            FaultTolerance::None | FaultTolerance::SkipStage => failures == 0,
        }
    }
}

impl fmt::Display for FaultTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
