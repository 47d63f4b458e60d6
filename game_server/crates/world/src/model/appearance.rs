#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    pub fn value(self) -> u8 {
        match self {
            Self::Male => 0,
            Self::Female => 1,
        }
    }
}

/// Body parts with a selectable style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Hair,
    FacialHair,
    Chest,
    Arms,
    Hands,
    Legs,
    Feet,
}

/// Recolourable parts, in the order the client reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyColour {
    Hair,
    Torso,
    Legs,
    Feet,
    Skin,
}

/// Marks a style id as a body model rather than an item.
pub const STYLE_MASK: i32 = 0x100;

const MALE_STYLES: [i32; 7] = [0, 14, 18, 26, 34, 36, 42];
const FEMALE_STYLES: [i32; 7] = [45, -1, 56, 61, 67, 70, 79];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appearance {
    gender: Gender,
    styles: [i32; 7],
    colours: [u8; 5],
}

impl Appearance {
    pub fn new(gender: Gender) -> Self {
        let styles = match gender {
            Gender::Male => MALE_STYLES,
            Gender::Female => FEMALE_STYLES,
        };
        Self {
            gender,
            styles,
            colours: [0; 5],
        }
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn is_female(&self) -> bool {
        self.gender == Gender::Female
    }

    /// Raw style id of a body part.
    pub fn style(&self, part: BodyPart) -> i32 {
        self.styles[part as usize]
    }

    /// Style id as written to the client, tagged with [`STYLE_MASK`].
    pub fn masked_style(&self, part: BodyPart) -> i32 {
        self.style(part) | STYLE_MASK
    }

    pub fn set_style(&mut self, part: BodyPart, style: i32) {
        self.styles[part as usize] = style;
    }

    pub fn colour(&self, part: BodyColour) -> u8 {
        self.colours[part as usize]
    }

    pub fn set_colour(&mut self, part: BodyColour, colour: u8) {
        self.colours[part as usize] = colour;
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self::new(Gender::Male)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_defaults() {
        let male = Appearance::default();
        assert_eq!(male.style(BodyPart::Chest), 18);
        assert_eq!(male.style(BodyPart::FacialHair), 14);
        assert_eq!(male.masked_style(BodyPart::Feet), 42 | 0x100);

        let female = Appearance::new(Gender::Female);
        assert!(female.is_female());
        assert_eq!(female.style(BodyPart::Hair), 45);
        assert_eq!(female.style(BodyPart::FacialHair), -1);
        assert_eq!(female.colour(BodyColour::Skin), 0);
    }

    #[test]
    fn colours_are_independent() {
        let mut appearance = Appearance::default();
        appearance.set_colour(BodyColour::Legs, 7);
        assert_eq!(appearance.colour(BodyColour::Legs), 7);
        assert_eq!(appearance.colour(BodyColour::Feet), 0);
    }
}
