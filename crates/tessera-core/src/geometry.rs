#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size<T> {
    pub width: T,
    pub height: T,
}

impl<T> Size<T> {
    pub const fn new(width: T, height: T) -> Self {
        Size { width, height }
    }
}

impl Size<u32> {
    /// Halve both dimensions `times` times, never going below one pixel.
    pub fn halved(self, times: u32) -> Self {
        let shift = times.min(31);
        Size {
            width: (self.width >> shift).max(1),
            height: (self.height >> shift).max(1),
        }
    }
}

impl From<(u32, u32)> for Size<u32> {
    fn from((width, height): (u32, u32)) -> Self {
        Size { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halved() {
        let size = Size::new(1920u32, 1080u32);
        assert_eq!(size.halved(0), size);
        assert_eq!(size.halved(1), Size::new(960, 540));
        assert_eq!(size.halved(2), Size::new(480, 270));
    }

    #[test]
    fn test_halved_clamps_to_one() {
        let size = Size::new(4u32, 2u32);
        assert_eq!(size.halved(3), Size::new(1, 1));
        assert_eq!(size.halved(40), Size::new(1, 1));
    }
}
