// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Contract for growing an externally owned byte region.
//!
//! A heap-backed sketch never calls this: growth always happens by
//! reallocating its own `Vec`s. The trait exists so that a sketch obtained
//! via [`wrap`](crate::kll) can describe, at the API level, how an
//! off-heap-backed implementation would be asked to grow its storage.

use crate::error::Error;

/// External collaborator that grows (or shrinks, on release) a byte region
/// backing a memory-mapped or off-heap sketch.
pub trait MemorySegmentService: Send + Sync {
    /// Returns a region of at least `required_size` bytes, with the first
    /// `old.len()` bytes of `old` (if any) preserved at the front.
    ///
    /// When `release_old` is true the caller no longer needs `old` after
    /// this call returns and the service may free it.
    fn request(
        &self,
        old: Option<&[u8]>,
        required_size: usize,
        release_old: bool,
    ) -> Result<Vec<u8>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A service that never has room, used to exercise the `OutOfMemory`
    /// error path a heap-backed sketch never reaches on its own.
    struct AlwaysFull;

    impl MemorySegmentService for AlwaysFull {
        fn request(
            &self,
            _old: Option<&[u8]>,
            required_size: usize,
            _release_old: bool,
        ) -> Result<Vec<u8>, Error> {
            Err(Error::out_of_memory(format!(
                "no region available for {required_size} bytes"
            )))
        }
    }

    #[test]
    fn request_failure_surfaces_out_of_memory() {
        let service = AlwaysFull;
        let err = service.request(None, 4096, false).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::OutOfMemory);
    }
}
