/// Fallible async counterpart to `TryFrom<T>`.
///
/// Used for conversions that have to touch the filesystem, such as deriving
/// a content id from the bytes behind a path.
///
/// # Examples
///
/// ```rust,ignore
/// let id = ContentId::async_try_from(Path::new("gfx/logo.png")).await?;
/// ```
pub trait AsyncTryFrom<T>: Sized {
    /// The error type that can occur during conversion.
    type Error;

    /// Performs the fallible asynchronous conversion from `T` to `Self`.
    async fn async_try_from(value: T) -> Result<Self, Self::Error>;
}

/// Async counterpart to `TryInto<T>`, implemented for every `T` whose target
/// implements [`AsyncTryFrom`].
pub trait AsyncTryInto<T> {
    /// The error type that can occur during conversion.
    type Error;

    /// Performs the fallible asynchronous conversion from `Self` to `T`.
    async fn async_try_into(self) -> Result<T, Self::Error>;
}

impl<T, U> AsyncTryInto<U> for T
where
    U: AsyncTryFrom<T>,
{
    type Error = U::Error;

    async fn async_try_into(self) -> Result<U, Self::Error> {
        U::async_try_from(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EvenLength(usize);

    impl AsyncTryFrom<&str> for EvenLength {
        type Error = usize;

        async fn async_try_from(value: &str) -> Result<Self, Self::Error> {
            if value.len() % 2 == 0 {
                Ok(EvenLength(value.len()))
            } else {
                Err(value.len())
            }
        }
    }

    #[test]
    fn async_try_from_accepts_valid_input() {
        futures::executor::block_on(async {
            let converted = EvenLength::async_try_from("abcd").await.unwrap();
            assert_eq!(converted.0, 4);
        });
    }

    #[test]
    fn async_try_from_rejects_invalid_input() {
        futures::executor::block_on(async {
            let result = EvenLength::async_try_from("abc").await;
            assert!(matches!(result, Err(3)));
        });
    }

    #[test]
    fn async_try_into_delegates_to_async_try_from() {
        futures::executor::block_on(async {
            let converted: Result<EvenLength, _> = "ab".async_try_into().await;
            assert_eq!(converted.unwrap().0, 2);
        });
    }
}
