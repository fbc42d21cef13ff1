use serde::Serialize;

pub type Token = u8;

pub const TOKEN_EMPTY: Token = 0;
pub const TOKEN_BEDROCK: Token = 8;
pub const MAX_TOKEN: Token = TOKEN_BEDROCK;

pub const MASK_SIZE: usize = 4;

type Mask = [Token; MASK_SIZE * MASK_SIZE];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PieceKind {
    T,
    L,
    I,
    J,
    O,
    S,
    Z,
}

impl PieceKind {
    pub fn token(self) -> Token {
        match self {
            Self::T => 1,
            Self::L => 2,
            Self::I => 3,
            Self::J => 4,
            Self::O => 5,
            Self::S => 6,
            Self::Z => 7,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    rotations: &'static [Mask],
}

impl Piece {
    pub fn token(&self) -> Token {
        self.kind.token()
    }

    pub fn rotation_count(&self) -> usize {
        self.rotations.len()
    }

    pub fn clamp_rotation(&self, rotation: i32) -> usize {
        rotation.rem_euclid(self.rotations.len() as i32) as usize
    }

    pub fn cell(&self, rotation: i32, x: usize, y: usize) -> Token {
        self.rotations[self.clamp_rotation(rotation)][y * MASK_SIZE + x]
    }

    pub fn cells(&self, rotation: i32) -> impl Iterator<Item = (i32, i32)> + '_ {
        let mask = &self.rotations[self.clamp_rotation(rotation)];
        mask.iter().enumerate().filter_map(|(index, token)| {
            (*token != TOKEN_EMPTY).then_some(((index % MASK_SIZE) as i32, (index / MASK_SIZE) as i32))
        })
    }
}

const T_: Token = 1;
const L_: Token = 2;
const I_: Token = 3;
const J_: Token = 4;
const O_: Token = 5;
const S_: Token = 6;
const Z_: Token = 7;

pub static T: Piece = Piece {
    kind: PieceKind::T,
    rotations: &[
        [0, 0, 0, 0, T_, T_, T_, 0, 0, T_, 0, 0, 0, 0, 0, 0],
        [0, T_, 0, 0, T_, T_, 0, 0, 0, T_, 0, 0, 0, 0, 0, 0],
        [0, T_, 0, 0, T_, T_, T_, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, T_, 0, 0, 0, T_, T_, 0, 0, T_, 0, 0, 0, 0, 0, 0],
    ],
};

pub static L: Piece = Piece {
    kind: PieceKind::L,
    rotations: &[
        [0, 0, 0, 0, L_, L_, L_, 0, 0, 0, L_, 0, 0, 0, 0, 0],
        [0, L_, 0, 0, 0, L_, 0, 0, L_, L_, 0, 0, 0, 0, 0, 0],
        [L_, 0, 0, 0, L_, L_, L_, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, L_, L_, 0, 0, L_, 0, 0, 0, L_, 0, 0, 0, 0, 0, 0],
    ],
};

pub static I: Piece = Piece {
    kind: PieceKind::I,
    rotations: &[
        [0, 0, 0, 0, 0, 0, 0, 0, I_, I_, I_, I_, 0, 0, 0, 0],
        [0, 0, I_, 0, 0, 0, I_, 0, 0, 0, I_, 0, 0, 0, I_, 0],
    ],
};

pub static J: Piece = Piece {
    kind: PieceKind::J,
    rotations: &[
        [0, 0, 0, 0, J_, J_, J_, 0, J_, 0, 0, 0, 0, 0, 0, 0],
        [J_, J_, 0, 0, 0, J_, 0, 0, 0, J_, 0, 0, 0, 0, 0, 0],
        [0, 0, J_, 0, J_, J_, J_, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, J_, 0, 0, 0, J_, 0, 0, 0, J_, J_, 0, 0, 0, 0, 0],
    ],
};

pub static O: Piece = Piece {
    kind: PieceKind::O,
    rotations: &[[0, 0, 0, 0, 0, O_, O_, 0, 0, O_, O_, 0, 0, 0, 0, 0]],
};

pub static S: Piece = Piece {
    kind: PieceKind::S,
    rotations: &[
        [0, 0, 0, 0, 0, S_, S_, 0, S_, S_, 0, 0, 0, 0, 0, 0],
        [0, S_, 0, 0, 0, S_, S_, 0, 0, 0, S_, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, S_, S_, 0, S_, S_, 0, 0, 0, 0, 0, 0],
        [0, S_, 0, 0, 0, S_, S_, 0, 0, 0, S_, 0, 0, 0, 0, 0],
    ],
};

pub static Z: Piece = Piece {
    kind: PieceKind::Z,
    rotations: &[
        [0, 0, 0, 0, Z_, Z_, 0, 0, 0, Z_, Z_, 0, 0, 0, 0, 0],
        [0, 0, Z_, 0, 0, Z_, Z_, 0, 0, Z_, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, Z_, Z_, 0, 0, 0, Z_, Z_, 0, 0, 0, 0, 0],
        [0, 0, Z_, 0, 0, Z_, Z_, 0, 0, Z_, 0, 0, 0, 0, 0, 0],
    ],
};

pub static ALL: [&Piece; 7] = [&T, &L, &I, &J, &O, &S, &Z];

pub fn by_token(token: Token) -> Option<&'static Piece> {
    ALL.iter().copied().find(|piece| piece.token() == token)
}
