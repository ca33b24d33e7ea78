use crate::error::EngineError;
use std::fmt;
use std::str::FromStr;

/// A fiscal quarter label such as `2024Q3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiscalQuarter {
    pub year: i32,
    pub quarter: u8,
}

impl FiscalQuarter {
    pub fn new(year: i32, quarter: u8) -> Option<Self> {
        (1..=4).contains(&quarter).then_some(Self { year, quarter })
    }

    /// The following quarter; Q4 wraps into Q1 of the next year.
    pub fn next(self) -> Self {
        if self.quarter == 4 {
            Self {
                year: self.year + 1,
                quarter: 1,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter + 1,
            }
        }
    }

    /// `n` consecutive quarters strictly after `self`.
    pub fn following(self, n: usize) -> Vec<FiscalQuarter> {
        std::iter::successors(Some(self.next()), |q| Some(q.next()))
            .take(n)
            .collect()
    }
}

impl FromStr for FiscalQuarter {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || EngineError::MalformedPeriod(s.to_string());

        let trimmed = s.trim();
        let (year_part, quarter_part) = trimmed
            .split_once(['Q', 'q'])
            .ok_or_else(malformed)?;

        // Accept "2024Q3" as well as "2024-Q3" / "2024 Q3".
        let year_part = year_part.trim_end_matches(['-', ' ']);
        if year_part.len() != 4 || !year_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let year = year_part.parse::<i32>().map_err(|_| malformed())?;
        let quarter = quarter_part.parse::<u8>().map_err(|_| malformed())?;
        FiscalQuarter::new(year, quarter).ok_or_else(malformed)
    }
}

impl fmt::Display for FiscalQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

/// Labels for the `n` quarters after `last_period`. Fails only if `last_period` is malformed.
pub fn advance_periods(last_period: &str, n: usize) -> Result<Vec<String>, EngineError> {
    let last = last_period.parse::<FiscalQuarter>()?;
    Ok(last.following(n).iter().map(ToString::to_string).collect())
}
