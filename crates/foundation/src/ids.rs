use rand::Rng;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of generated ids. 11 base36 digits cover most of a `u64`.
pub const ID_LEN: usize = 11;

/// Random lowercase base36 id of `ID_LEN` characters.
pub fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// Draws random ids until one is not `taken`.
///
/// The caller owns the uniqueness domain (typically a collection scan).
pub fn unique_id<R, F>(rng: &mut R, mut taken: F) -> String
where
    R: Rng + ?Sized,
    F: FnMut(&str) -> bool,
{
    loop {
        let id = random_id(rng);
        if !taken(&id) {
            return id;
        }
    }
}
