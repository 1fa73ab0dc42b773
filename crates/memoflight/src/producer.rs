// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The asynchronous function wrapped by a memoizer.

/// An asynchronous, fallible computation keyed by its arguments.
///
/// Any `Fn(A) -> impl Future<Output = Result<V, E>>` is a producer, so closures and async
/// functions can be passed to [`Memoizer::builder`](crate::Memoizer::builder) directly.
/// A producer without arguments takes `()`; a producer with several arguments takes a tuple.
///
/// # Examples
///
/// ```
/// use memoflight::Producer;
///
/// async fn lookup((region, id): (String, u64)) -> Result<String, std::io::Error> {
///     Ok(format!("{region}/{id}"))
/// }
///
/// fn assert_producer<P: Producer<(String, u64), Value = String>>(_: &P) {}
///
/// assert_producer(&lookup);
/// ```
pub trait Producer<A> {
    /// The value produced on success.
    type Value;

    /// The error produced on failure.
    type Error;

    /// The future returned by [`produce`](Self::produce).
    type Future: Future<Output = Result<Self::Value, Self::Error>>;

    /// Starts producing a value for `args`.
    fn produce(&self, args: A) -> Self::Future;
}

impl<A, F, Fut, V, E> Producer<A> for F
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    type Value = V;
    type Error = E;
    type Future = Fut;

    fn produce(&self, args: A) -> Self::Future {
        self(args)
    }
}
