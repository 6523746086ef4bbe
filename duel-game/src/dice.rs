use duel_core::{DICE_MAX, DICE_MIN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of die faces.
pub trait DiceRoller: Send {
    /// One face value in `DICE_MIN..=DICE_MAX`.
    fn roll(&mut self) -> u8;

    /// Random index below `len`, used to pick message variants.
    fn pick(&mut self, len: usize) -> usize;
}

/// Uniform rolls from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRoller;

impl DiceRoller for ThreadRoller {
    fn roll(&mut self) -> u8 {
        rand::thread_rng().gen_range(DICE_MIN..=DICE_MAX)
    }

    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..len)
    }
}

/// Reproducible rolls from a fixed seed.
#[derive(Debug, Clone)]
pub struct SeededRoller {
    rng: StdRng,
}

impl SeededRoller {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DiceRoller for SeededRoller {
    fn roll(&mut self) -> u8 {
        self.rng.gen_range(DICE_MIN..=DICE_MAX)
    }

    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed list of faces, cycling when it runs out.
#[derive(Debug, Clone)]
pub struct ScriptedRoller {
    faces: Vec<u8>,
    next: usize,
}

impl ScriptedRoller {
    /// An empty script rolls `DICE_MIN` forever.
    pub fn new(faces: Vec<u8>) -> Self {
        let faces = if faces.is_empty() { vec![DICE_MIN] } else { faces };
        Self { faces, next: 0 }
    }
}

impl DiceRoller for ScriptedRoller {
    fn roll(&mut self) -> u8 {
        let face = self.faces[self.next % self.faces.len()];
        self.next += 1;
        face
    }

    fn pick(&mut self, _len: usize) -> usize {
        0
    }
}
