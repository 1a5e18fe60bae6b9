use serde_repr::{Deserialize_repr, Serialize_repr};
use std::convert::TryFrom;

/// Team identifier as reported by the upstream payload.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TeamSide {
    Blue = 100,
    Red = 200
}

impl TeamSide {
    pub fn opponent(&self) -> TeamSide {
        match self {
            TeamSide::Blue => TeamSide::Red,
            TeamSide::Red => TeamSide::Blue
        }
    }
}

impl TryFrom<i32> for TeamSide {
    type Error = ();

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            100 => Ok(TeamSide::Blue),
            200 => Ok(TeamSide::Red),
            _ => Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TeamSide;

    #[test]
    fn test_convert() {
        assert_eq!(TeamSide::try_from(100), Ok(TeamSide::Blue));
        assert_eq!(TeamSide::try_from(200), Ok(TeamSide::Red));
        assert_eq!(TeamSide::try_from(300), Err(()));
    }

    #[test]
    fn test_opponent() {
        assert_eq!(TeamSide::Blue.opponent(), TeamSide::Red);
        assert_eq!(TeamSide::Red.opponent(), TeamSide::Blue);
    }
}
