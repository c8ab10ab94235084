/// Result of a rewrite step: `Yes` when the input was replaced, `No` when it came back as is.
#[derive(Debug, PartialEq, Clone)]
pub enum Transformed<T> {
    Yes(T),
    No(T),
}

impl<T> Transformed<T> {
    pub fn into_inner(self) -> T {
        match self {
            Transformed::Yes(value) | Transformed::No(value) => value,
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Transformed::Yes(_))
    }
}

impl<T: PartialEq> Transformed<T> {
    /// `Yes` if `rewritten` differs from `original`.
    pub fn compare(original: &T, rewritten: T) -> Self {
        if *original == rewritten {
            Transformed::No(rewritten)
        } else {
            Transformed::Yes(rewritten)
        }
    }
}
