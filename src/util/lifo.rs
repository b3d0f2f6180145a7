//! LIFO stack implemented using Vec
use serde::{Deserialize, Serialize};
use std::ops::Index;
use std::slice::{Iter, IterMut};
use std::vec::IntoIter;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Lifo<A> {
    stack: Vec<A>,
}

impl<A> Default for Lifo<A> {
    fn default() -> Self {
        Self { stack: Vec::new() }
    }
}

impl<A> Lifo<A> {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }
    pub fn iter(&self) -> Iter<'_, A> {
        self.stack.iter()
    }
    pub fn iter_mut(&mut self) -> IterMut<'_, A> {
        self.stack.iter_mut()
    }
    pub fn push(&mut self, e: A) {
        self.stack.push(e);
    }
    pub fn pop(&mut self) -> Option<A> {
        self.stack.pop()
    }
    /// The most recently pushed element, consumed first on disposal.
    pub fn peek(&self) -> Option<&A> {
        self.stack.last()
    }
    pub fn peek_mut(&mut self) -> Option<&mut A> {
        self.stack.last_mut()
    }
    pub fn len(&self) -> usize {
        self.stack.len()
    }
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl<A> Index<usize> for Lifo<A> {
    type Output = A;

    fn index(&self, index: usize) -> &Self::Output {
        self.stack.index(index)
    }
}

impl<A> FromIterator<A> for Lifo<A> {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        let iterator = iter.into_iter();
        let mut stack = Lifo::<A>::new();
        stack.extend(iterator);
        stack
    }
}

impl<A> IntoIterator for Lifo<A> {
    type Item = A;
    type IntoIter = IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.stack.into_iter()
    }
}

impl<A> Extend<A> for Lifo<A> {
    fn extend<T: IntoIterator<Item = A>>(&mut self, iter: T) {
        for item in iter.into_iter() {
            self.push(item);
        }
    }
}
