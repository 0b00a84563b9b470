use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The effect selected on the pad. Tags are the integers the control
/// surface sends; they are stable.
#[derive(ValueEnum, Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EffectMode {
    Filter,
    Chorus,
    Reverb,
    Phaser,
    Bitcrusher,
    RingMod,
    Glitch,
}

impl EffectMode {
    pub const ALL: [Self; 7] = [
        Self::Filter,
        Self::Chorus,
        Self::Reverb,
        Self::Phaser,
        Self::Bitcrusher,
        Self::RingMod,
        Self::Glitch,
    ];

    /// Decode a control-surface tag. Unknown tags have no effect attached.
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Filter),
            1 => Some(Self::Chorus),
            2 => Some(Self::Reverb),
            3 => Some(Self::Phaser),
            4 => Some(Self::Bitcrusher),
            5 => Some(Self::RingMod),
            6 => Some(Self::Glitch),
            _ => None,
        }
    }

    pub const fn tag(self) -> i32 {
        match self {
            Self::Filter => 0,
            Self::Chorus => 1,
            Self::Reverb => 2,
            Self::Phaser => 3,
            Self::Bitcrusher => 4,
            Self::RingMod => 5,
            Self::Glitch => 6,
        }
    }

    /// Pad axis labels, X then Y.
    pub const fn axis_names(self) -> (&'static str, &'static str) {
        match self {
            Self::Filter => ("cutoff", "resonance"),
            Self::Chorus => ("rate", "depth"),
            Self::Reverb => ("decay", "mix"),
            Self::Phaser => ("rate", "feedback"),
            Self::Bitcrusher => ("bits", "divisor"),
            Self::RingMod => ("frequency", "mix"),
            Self::Glitch => ("grain", "mix"),
        }
    }
}

impl std::fmt::Display for EffectMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filter => write!(f, "Filter"),
            Self::Chorus => write!(f, "Chorus"),
            Self::Reverb => write!(f, "Reverb"),
            Self::Phaser => write!(f, "Phaser"),
            Self::Bitcrusher => write!(f, "Crush"),
            Self::RingMod => write!(f, "Ring Mod"),
            Self::Glitch => write!(f, "Glitch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for mode in EffectMode::ALL {
            assert_eq!(EffectMode::from_tag(mode.tag()), Some(mode));
        }
    }

    #[test]
    fn unknown_tags_have_no_mode() {
        assert_eq!(EffectMode::from_tag(-1), None);
        assert_eq!(EffectMode::from_tag(7), None);
        assert_eq!(EffectMode::from_tag(i32::MAX), None);
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!(
            EffectMode::from_str("ring-mod", true).ok(),
            Some(EffectMode::RingMod)
        );
        assert_eq!(
            EffectMode::from_str("GLITCH", true).ok(),
            Some(EffectMode::Glitch)
        );
    }
}
