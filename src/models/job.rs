pub const DEFAULT_CRON: &str = "* * * * *";
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub cron: String,
    pub max_retries: u32,
}

impl JobConfig {
    /// Blank cron and zero retries fall back to the defaults.
    pub fn new(cron: Option<&str>, max_retries: u32) -> Self {
        let cron = match cron.map(str::trim) {
            Some(expr) if !expr.is_empty() => expr.to_string(),
            _ => DEFAULT_CRON.to_string(),
        };

        let max_retries = if max_retries == 0 {
            DEFAULT_MAX_RETRIES
        } else {
            max_retries
        };

        Self { cron, max_retries }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self::new(None, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl JobOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            JobOutcome::Succeeded { attempts } | JobOutcome::Exhausted { attempts } => *attempts,
        }
    }
}
