//! XP to level conversion.
//!
//! Levels start at 1 and advance every [`XP_PER_LEVEL`] points.

pub const XP_PER_LEVEL: u32 = 500;

#[must_use]
pub fn level_for_xp(xp: u32) -> u32 {
    xp / XP_PER_LEVEL + 1
}

/// XP earned since the current level began.
#[must_use]
pub fn xp_into_level(xp: u32) -> u32 {
    xp % XP_PER_LEVEL
}

/// XP still needed to reach the next level (never zero).
#[must_use]
pub fn xp_to_next_level(xp: u32) -> u32 {
    XP_PER_LEVEL - xp_into_level(xp)
}

/// Level before and after an XP award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub previous: u32,
    pub current: u32,
}

impl LevelChange {
    #[must_use]
    pub fn between(xp_before: u32, xp_after: u32) -> Self {
        Self {
            previous: level_for_xp(xp_before),
            current: level_for_xp(xp_after),
        }
    }

    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.current > self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_floor_div_plus_one() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(499), 1);
        assert_eq!(level_for_xp(500), 2);
        assert_eq!(level_for_xp(1_250), 3);
    }

    #[test]
    fn progress_within_level() {
        assert_eq!(xp_into_level(730), 230);
        assert_eq!(xp_to_next_level(730), 270);
        assert_eq!(xp_to_next_level(1_000), XP_PER_LEVEL);
    }

    #[test]
    fn level_change_detects_level_up() {
        assert!(LevelChange::between(450, 520).leveled_up());
        assert!(!LevelChange::between(100, 200).leveled_up());
    }
}
