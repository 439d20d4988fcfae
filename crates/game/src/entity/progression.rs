use tracing::info;

pub const MAX_SKILL_LEVEL: u32 = 10;
const BASE_XP_TO_NEXT: f32 = 100.0;
const XP_GROWTH: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skill {
    Strength,
    Fitness,
    Melee,
    Ranged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillLevel {
    pub level: u32,
    pub xp: f32,
    pub xp_to_next: f32,
}

impl Default for SkillLevel {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0.0,
            xp_to_next: BASE_XP_TO_NEXT,
        }
    }
}

impl SkillLevel {
    pub fn at_level(level: u32) -> Self {
        let mut skill = Self::default();
        while skill.level < level.min(MAX_SKILL_LEVEL) {
            skill.level += 1;
            skill.xp_to_next *= XP_GROWTH;
        }
        skill
    }

    /// Adds xp, carrying the excess over each level-up. Returns levels gained.
    fn add_xp(&mut self, amount: f32) -> u32 {
        if self.level >= MAX_SKILL_LEVEL || amount <= 0.0 {
            return 0;
        }
        self.xp += amount;
        let mut gained = 0;
        while self.level < MAX_SKILL_LEVEL && self.xp >= self.xp_to_next {
            self.xp -= self.xp_to_next;
            self.xp_to_next *= XP_GROWTH;
            self.level += 1;
            gained += 1;
        }
        if self.level >= MAX_SKILL_LEVEL {
            self.xp = 0.0;
        }
        gained
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProgression {
    pub strength: SkillLevel,
    pub fitness: SkillLevel,
    pub melee: SkillLevel,
    pub ranged: SkillLevel,
    pub lucky: f32,
    pub speed: f32,
}

impl Default for PlayerProgression {
    fn default() -> Self {
        Self {
            strength: SkillLevel::default(),
            fitness: SkillLevel::default(),
            melee: SkillLevel::default(),
            ranged: SkillLevel::default(),
            lucky: 1.0,
            speed: 1.0,
        }
    }
}

impl PlayerProgression {
    pub fn skill(&self, skill: Skill) -> &SkillLevel {
        match skill {
            Skill::Strength => &self.strength,
            Skill::Fitness => &self.fitness,
            Skill::Melee => &self.melee,
            Skill::Ranged => &self.ranged,
        }
    }

    fn skill_mut(&mut self, skill: Skill) -> &mut SkillLevel {
        match skill {
            Skill::Strength => &mut self.strength,
            Skill::Fitness => &mut self.fitness,
            Skill::Melee => &mut self.melee,
            Skill::Ranged => &mut self.ranged,
        }
    }

    pub fn add_xp(&mut self, skill: Skill, amount: f32) -> u32 {
        let gained = self.skill_mut(skill).add_xp(amount);
        if gained > 0 {
            info!(skill = ?skill, level = self.skill(skill).level, "skill_level_up");
        }
        gained
    }

    pub fn melee_damage_multiplier(&self) -> f32 {
        1.0 + 0.08 * (self.strength.level - 1) as f32
    }

    pub fn bonus_max_stamina(&self) -> f32 {
        5.0 * (self.fitness.level - 1) as f32
    }

    pub fn melee_stamina_multiplier(&self) -> f32 {
        (1.0 - 0.05 * (self.melee.level - 1) as f32).max(0.1)
    }

    pub fn spread_multiplier(&self) -> f32 {
        (1.0 - 0.06 * (self.ranged.level - 1) as f32).max(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_carries_over_and_threshold_grows() {
        let mut progression = PlayerProgression::default();
        assert_eq!(progression.add_xp(Skill::Melee, 130.0), 1);
        assert_eq!(progression.melee.level, 2);
        assert!((progression.melee.xp - 30.0).abs() < 1e-4);
        assert!((progression.melee.xp_to_next - 150.0).abs() < 1e-4);
    }

    #[test]
    fn level_caps_at_ten() {
        let mut progression = PlayerProgression::default();
        progression.add_xp(Skill::Ranged, 1_000_000.0);
        assert_eq!(progression.ranged.level, MAX_SKILL_LEVEL);
        assert_eq!(progression.add_xp(Skill::Ranged, 50.0), 0);
    }

    #[test]
    fn level_effects() {
        let progression = PlayerProgression {
            strength: SkillLevel::at_level(3),
            fitness: SkillLevel::at_level(2),
            ..PlayerProgression::default()
        };
        assert!((progression.melee_damage_multiplier() - 1.16).abs() < 1e-5);
        assert_eq!(progression.bonus_max_stamina(), 5.0);
        assert_eq!(progression.spread_multiplier(), 1.0);
    }
}
