use std::collections::HashSet;
use std::hash::Hash;

/// Return the elements of `a` whose key is not among the keys of `b`.
///
/// `key_a` and `key_b` project each side onto a common comparable key.
/// The relative order of `a` is preserved and duplicates in `a` are tested
/// independently; only membership in `b` matters.
pub fn diff_by_key<A, B, K, FA, FB>(a: Vec<A>, b: &[B], key_a: FA, key_b: FB) -> Vec<A>
where
    K: Eq + Hash,
    FA: Fn(&A) -> K,
    FB: Fn(&B) -> K,
{
    let indexed: HashSet<K> = b.iter().map(key_b).collect();

    let mut result = Vec::with_capacity(a.len().saturating_sub(indexed.len()));
    for element in a {
        if !indexed.contains(&key_a(&element)) {
            result.push(element);
        }
    }

    result
}

/// Return the elements of `a` not present in `b`.
pub fn diff<T>(a: Vec<T>, b: &[T]) -> Vec<T>
where
    T: Eq + Hash,
{
    let indexed: HashSet<&T> = b.iter().collect();
    a.into_iter().filter(|e| !indexed.contains(e)).collect()
}
