#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Health,
    Stamina,
    Water,
    Food,
    Infection,
    Anxiety,
    Tireness,
}

impl StatKind {
    pub const ALL: [StatKind; 7] = [
        StatKind::Health,
        StatKind::Stamina,
        StatKind::Water,
        StatKind::Food,
        StatKind::Infection,
        StatKind::Anxiety,
        StatKind::Tireness,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        let kind = match raw.trim().to_ascii_lowercase().as_str() {
            "health" | "hp" => Self::Health,
            "stamina" => Self::Stamina,
            "water" | "thirst" => Self::Water,
            "food" | "hunger" => Self::Food,
            "infection" => Self::Infection,
            "anxiety" => Self::Anxiety,
            "tireness" | "tiredness" => Self::Tireness,
            _ => return None,
        };
        Some(kind)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Stamina => "Stamina",
            Self::Water => "Water",
            Self::Food => "Food",
            Self::Infection => "Infection",
            Self::Anxiety => "Anxiety",
            Self::Tireness => "Tireness",
        }
    }
}

/// Player vitals, each kept within `[0, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    health: f32,
    stamina: f32,
    water: f32,
    food: f32,
    infection: f32,
    anxiety: f32,
    tireness: f32,
    pub max_health: f32,
    pub max_stamina: f32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            health: 100.0,
            stamina: 100.0,
            water: 100.0,
            food: 100.0,
            infection: 0.0,
            anxiety: 0.0,
            tireness: 0.0,
            max_health: 100.0,
            max_stamina: 100.0,
        }
    }
}

impl Stats {
    pub fn get(&self, kind: StatKind) -> f32 {
        match kind {
            StatKind::Health => self.health,
            StatKind::Stamina => self.stamina,
            StatKind::Water => self.water,
            StatKind::Food => self.food,
            StatKind::Infection => self.infection,
            StatKind::Anxiety => self.anxiety,
            StatKind::Tireness => self.tireness,
        }
    }

    pub fn max(&self, kind: StatKind) -> f32 {
        match kind {
            StatKind::Health => self.max_health,
            StatKind::Stamina => self.max_stamina,
            _ => 100.0,
        }
    }

    pub fn set(&mut self, kind: StatKind, value: f32) {
        let clamped = value.clamp(0.0, self.max(kind));
        let slot = match kind {
            StatKind::Health => &mut self.health,
            StatKind::Stamina => &mut self.stamina,
            StatKind::Water => &mut self.water,
            StatKind::Food => &mut self.food,
            StatKind::Infection => &mut self.infection,
            StatKind::Anxiety => &mut self.anxiety,
            StatKind::Tireness => &mut self.tireness,
        };
        *slot = clamped;
    }

    pub fn add(&mut self, kind: StatKind, delta: f32) {
        self.set(kind, self.get(kind) + delta);
    }

    pub fn set_max_stamina(&mut self, max: f32) {
        self.max_stamina = max.max(1.0);
        self.set(StatKind::Stamina, self.stamina);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_clamps_to_bounds() {
        let mut stats = Stats::default();
        stats.add(StatKind::Water, 50.0);
        assert_eq!(stats.get(StatKind::Water), 100.0);
        stats.add(StatKind::Food, -150.0);
        assert_eq!(stats.get(StatKind::Food), 0.0);
        stats.set_max_stamina(80.0);
        assert_eq!(stats.get(StatKind::Stamina), 80.0);
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(StatKind::parse("HP"), Some(StatKind::Health));
        assert_eq!(StatKind::parse("tiredness"), Some(StatKind::Tireness));
        assert_eq!(StatKind::parse("mana"), None);
    }
}
