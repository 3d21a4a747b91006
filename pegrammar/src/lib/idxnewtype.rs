// Copyright (c) 2018 King's College London
// created by the Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0
//
// Subject to the condition set forth below, permission is hereby granted to any person obtaining a
// copy of this software, associated documentation and/or data (collectively the "Software"), free
// of charge and under any and all copyright rights in the Software, and any and all patent rights
// owned or freely licensable by each licensor hereunder covering either (i) the unmodified
// Software as contributed to or provided by such licensor, or (ii) the Larger Works (as defined
// below), to deal in both
//
// (a) the Software, and
// (b) any piece of software and/or hardware listed in the lrgrwrks.txt file
// if one is included with the Software (each a "Larger Work" to which the Software is contributed
// by such licensors),
//
// without restriction, including without limitation the rights to copy, create derivative works
// of, display, perform, and distribute the Software and make, use, sell, offer for sale, import,
// export, have made, and have sold the Software and the Larger Work(s), and to sublicense the
// foregoing rights on either these or other terms.
//
// This license is subject to the following condition: The above copyright notice and either this
// complete permission notice or at a minimum a reference to the UPL must be included in all copies
// or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module provides newtypes for the two index types used throughout this crate: clause
//! indices and rule indices. Since both are stored as the user-selectable `StorageT` type, mixing
//! the two up is an easy mistake to make; the newtypes make such mix-ups a compile-time error.
//! Converting an index into `usize` is infallible: the grammar compiler refuses to create more
//! clauses or rules than `StorageT` can count.

use std::fmt;
use std::mem::size_of;

use num_traits::{self, AsPrimitive, PrimInt, Unsigned};

macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $n<StorageT>(pub StorageT);

        impl<StorageT: PrimInt + Unsigned> From<$n<StorageT>> for usize {
            fn from(idx: $n<StorageT>) -> usize {
                debug_assert!(size_of::<usize>() >= size_of::<StorageT>());
                num_traits::cast(idx.0).unwrap()
            }
        }

        impl<StorageT: 'static + PrimInt + Unsigned> $n<StorageT>
        where usize: AsPrimitive<StorageT>
        {
            /// Create an index from `i`, panicking if `i` cannot be represented in `StorageT`.
            pub(crate) fn new(i: usize) -> $n<StorageT> {
                assert!(i <= num_traits::cast(StorageT::max_value()).unwrap(),
                        "index {} out of range for StorageT", i);
                $n(i.as_())
            }
        }

        impl<StorageT: fmt::Display> fmt::Display for $n<StorageT> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    }
}

IdxNewtype!(
    /// A type specifically for clause indices.
    CIdx
);

IdxNewtype!(
    /// A type specifically for rule indices.
    RIdx
);

#[cfg(test)]
mod test {
    use super::{CIdx, RIdx};

    #[test]
    fn test_usize_conversion() {
        assert_eq!(usize::from(CIdx(7u32)), 7);
        assert_eq!(usize::from(RIdx(0u8)), 0);
        let c: CIdx<u16> = CIdx::new(65535);
        assert_eq!(usize::from(c), 65535);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range() {
        let _: CIdx<u8> = CIdx::new(256);
    }
}
