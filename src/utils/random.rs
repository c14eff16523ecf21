/// Uniform-ish random number in `0..max`. `max` must be non-zero.
pub fn get_random_u128(max: u128) -> anyhow::Result<u128, getrandom::Error>
{
        let mut buf = [0u8; 16];

        getrandom::fill(&mut buf)?;

        Ok(u128::from_ne_bytes(buf) % max)
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn stays_below_max()
        {
                for max in [1, 2, 7, 10]
                {
                        assert!(get_random_u128(max).unwrap() < max);
                }
        }
}
