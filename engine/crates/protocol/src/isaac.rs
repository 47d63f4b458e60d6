//! ISAAC keystream generator used to obscure frame opcodes.

const SIZE: usize = 256;
const GOLDEN_RATIO: u32 = 0x9e37_79b9;

/// Offset added to every seed word to derive the encoding generator.
pub const ENCODE_SEED_OFFSET: u32 = 50;

#[derive(Clone)]
pub struct IsaacRandom {
    results: [u32; SIZE],
    memory: [u32; SIZE],
    count: usize,
    accumulator: u32,
    last: u32,
    counter: u32,
}

impl IsaacRandom {
    pub fn new(seed: &[u32]) -> Self {
        let mut random = Self {
            results: [0; SIZE],
            memory: [0; SIZE],
            count: 0,
            accumulator: 0,
            last: 0,
            counter: 0,
        };
        let len = seed.len().min(SIZE);
        random.results[..len].copy_from_slice(&seed[..len]);
        random.init();
        random
    }

    pub fn next_u32(&mut self) -> u32 {
        if self.count == 0 {
            self.isaac();
            self.count = SIZE;
        }
        self.count -= 1;
        self.results[self.count]
    }

    fn isaac(&mut self) {
        self.counter = self.counter.wrapping_add(1);
        self.last = self.last.wrapping_add(self.counter);
        for i in 0..SIZE {
            let x = self.memory[i];
            self.accumulator ^= match i & 3 {
                0 => self.accumulator << 13,
                1 => self.accumulator >> 6,
                2 => self.accumulator << 2,
                _ => self.accumulator >> 16,
            };
            self.accumulator = self
                .accumulator
                .wrapping_add(self.memory[(i + SIZE / 2) & (SIZE - 1)]);
            let y = self.memory[((x >> 2) as usize) & (SIZE - 1)]
                .wrapping_add(self.accumulator)
                .wrapping_add(self.last);
            self.memory[i] = y;
            self.last = self.memory[((y >> 10) as usize) & (SIZE - 1)].wrapping_add(x);
            self.results[i] = self.last;
        }
    }

    fn init(&mut self) {
        let mut s = [GOLDEN_RATIO; 8];
        for _ in 0..4 {
            mix(&mut s);
        }

        for pass in 0..2 {
            for i in (0..SIZE).step_by(8) {
                let source = if pass == 0 { &self.results } else { &self.memory };
                for (j, word) in s.iter_mut().enumerate() {
                    *word = word.wrapping_add(source[i + j]);
                }
                mix(&mut s);
                self.memory[i..i + 8].copy_from_slice(&s);
            }
        }

        self.isaac();
        self.count = SIZE;
    }
}

impl std::fmt::Debug for IsaacRandom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsaacRandom").field("count", &self.count).finish()
    }
}

fn mix(s: &mut [u32; 8]) {
    s[0] ^= s[1] << 11;
    s[3] = s[3].wrapping_add(s[0]);
    s[1] = s[1].wrapping_add(s[2]);
    s[1] ^= s[2] >> 2;
    s[4] = s[4].wrapping_add(s[1]);
    s[2] = s[2].wrapping_add(s[3]);
    s[2] ^= s[3] << 8;
    s[5] = s[5].wrapping_add(s[2]);
    s[3] = s[3].wrapping_add(s[4]);
    s[3] ^= s[4] >> 16;
    s[6] = s[6].wrapping_add(s[3]);
    s[4] = s[4].wrapping_add(s[5]);
    s[4] ^= s[5] << 10;
    s[7] = s[7].wrapping_add(s[4]);
    s[5] = s[5].wrapping_add(s[6]);
    s[5] ^= s[6] >> 4;
    s[0] = s[0].wrapping_add(s[5]);
    s[6] = s[6].wrapping_add(s[7]);
    s[6] ^= s[7] << 8;
    s[1] = s[1].wrapping_add(s[6]);
    s[7] = s[7].wrapping_add(s[0]);
    s[7] ^= s[0] >> 9;
    s[2] = s[2].wrapping_add(s[7]);
    s[0] = s[0].wrapping_add(s[1]);
}

/// The decoding and encoding generators of one side of a connection.
#[derive(Debug, Clone)]
pub struct IsaacPair {
    pub decoding: IsaacRandom,
    pub encoding: IsaacRandom,
}

impl IsaacPair {
    /// Derives both generators from the four session-key words exchanged at login.
    pub fn from_seed(seed: [u32; 4]) -> Self {
        let encoding_seed = seed.map(|word| word.wrapping_add(ENCODE_SEED_OFFSET));
        Self {
            decoding: IsaacRandom::new(&seed),
            encoding: IsaacRandom::new(&encoding_seed),
        }
    }

    /// The pair the remote end holds: its encoder mirrors our decoder and vice versa.
    pub fn mirrored(seed: [u32; 4]) -> Self {
        let pair = Self::from_seed(seed);
        Self {
            decoding: pair.encoding,
            encoding: pair.decoding,
        }
    }
}
