#[macro_export]
/// This macro logs during test mode and returns early
/// useful for debugging.
macro_rules! fail {
    ($e:expr) => {
        #[cfg(test)]
        anchor_lang::prelude::msg!("Error {:?}", $e);
        return Err($e.into());
    };
}

#[macro_export]
macro_rules! some_or_break {
    ($res:expr) => {
        match $res {
            Some(val) => val,
            None => break,
        }
    };
}

/// Asserts two integer amounts are within `epsilon` of each other.
#[macro_export]
macro_rules! assert_fuzzy_eq {
    ($actual:expr, $expected:expr, $epsilon:expr) => {{
        let actual = $actual as i128;
        let expected = $expected as i128;
        let epsilon = $epsilon as i128;
        let diff = (actual - expected).abs();
        if diff > epsilon {
            panic!(
                "Actual {} Expected {} diff {} Epsilon {}",
                actual, expected, diff, epsilon
            );
        }
    }};
}
