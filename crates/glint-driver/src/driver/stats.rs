use core::fmt;

/// Resource operations performed since the previous command-list flush.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct OpCounters {
    pub textures_created: u32,
    pub textures_updated: u32,
    pub textures_destroyed: u32,
    pub geometries_created: u32,
    pub geometries_updated: u32,
    pub geometries_destroyed: u32,
}

impl OpCounters {
    #[inline]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for OpCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "textures +{}/~{}/-{}, geometries +{}/~{}/-{}",
            self.textures_created,
            self.textures_updated,
            self.textures_destroyed,
            self.geometries_created,
            self.geometries_updated,
            self.geometries_destroyed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_counter() {
        let c = OpCounters {
            textures_created: 2,
            geometries_destroyed: 1,
            ..Default::default()
        };
        assert_eq!(c.to_string(), "textures +2/~0/-0, geometries +0/~0/-1");
        assert!(!c.is_zero());
    }
}
