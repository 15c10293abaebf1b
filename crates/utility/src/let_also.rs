/// Kotlin-style scope functions, used to keep long method chains flowing.
pub trait LetAlso: Sized {
    /// Passes the value into `f` and returns whatever `f` returns.
    fn let_owned<R, F>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }

    /// Lets `f` mutate the value in place and hands it back.
    fn also<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        f(&mut self);
        self
    }
}

impl<T> LetAlso for T {}

#[cfg(test)]
mod tests {
    use super::LetAlso;

    #[test]
    fn let_owned_maps_value() {
        let wrapped: Result<usize, ()> = vec![1, 2, 3].len().let_owned(Ok);
        assert_eq!(wrapped, Ok(3));
    }

    #[test]
    fn also_mutates_and_returns() {
        let values = vec![3, 1, 2].also(|v| v.sort());
        assert_eq!(values, vec![1, 2, 3]);
    }
}
