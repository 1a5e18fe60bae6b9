use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter grade derived from the final 0-100 performance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "S+")]
    SPlus,
    S,
    A,
    B,
    C,
    D
}

impl Grade {
    pub fn from_score(score: f64) -> Grade {
        if score >= 95.0 {
            Grade::SPlus
        } else if score >= 85.0 {
            Grade::S
        } else if score >= 75.0 {
            Grade::A
        } else if score >= 60.0 {
            Grade::B
        } else if score >= 40.0 {
            Grade::C
        } else {
            Grade::D
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::SPlus => "S+",
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D"
        };
        f.write_str(s)
    }
}

/// Coarse comparison bucket shown alongside the grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparison {
    Excellent,
    Good,
    Average,
    Poor
}

impl Comparison {
    pub fn from_score(score: f64) -> Comparison {
        if score >= 75.0 {
            Comparison::Excellent
        } else if score >= 60.0 {
            Comparison::Good
        } else if score >= 40.0 {
            Comparison::Average
        } else {
            Comparison::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Comparison, Grade};

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(Grade::from_score(95.0), Grade::SPlus);
        assert_eq!(Grade::from_score(85.0), Grade::S);
        assert_eq!(Grade::from_score(75.0), Grade::A);
        assert_eq!(Grade::from_score(60.0), Grade::B);
        assert_eq!(Grade::from_score(40.0), Grade::C);
        assert_eq!(Grade::from_score(39.999), Grade::D);
        assert_eq!(Grade::from_score(0.0), Grade::D);
        assert_eq!(Grade::from_score(100.0), Grade::SPlus);
    }

    #[test]
    fn test_comparison_buckets() {
        assert_eq!(Comparison::from_score(80.0), Comparison::Excellent);
        assert_eq!(Comparison::from_score(65.0), Comparison::Good);
        assert_eq!(Comparison::from_score(45.0), Comparison::Average);
        assert_eq!(Comparison::from_score(10.0), Comparison::Poor);
    }
}
