// This file is part of the terraform-provider-fastly project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{pin::Pin, task::Poll};

use anyhow::{Context, Result};
use crypto::{digest::Digest, sha2::Sha512};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reader computing the digest of everything read through it
pub(super) struct HashingStream<D, I> {
    digest: D,
    inner: I,
}

impl<D: Digest, I> HashingStream<D, I> {
    pub(super) fn new(digest: D, inner: I) -> Self {
        Self { digest, inner }
    }

    pub(super) fn fingerprint_hex(&mut self) -> String {
        self.digest.result_str()
    }
}

impl<D: Digest + Unpin, I: AsyncRead + Unpin> AsyncRead for HashingStream<D, I> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let already_filled = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = poll {
            self.digest.input(&buf.filled()[already_filled..]);
        }

        poll
    }
}

/// Content of a package file with its SHA-512 in hex
pub(super) async fn read_package(path: &str) -> Result<(Vec<u8>, String)> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open package {path}"))?;
    let mut stream = HashingStream::new(Sha512::new(), file);
    let mut content = Vec::new();
    stream
        .read_to_end(&mut content)
        .await
        .with_context(|| format!("Failed to read package {path}"))?;
    Ok((content, stream.fingerprint_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn digest_covers_every_chunk() {
        let data = vec![7u8; 20000];
        let mut stream = HashingStream::new(Sha512::new(), data.as_slice());
        let mut chunk = [0u8; 1000];
        let mut total = 0;
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(total, data.len());

        let mut expected = Sha512::new();
        expected.input(&data);
        assert_eq!(stream.fingerprint_hex(), expected.result_str());
    }

    #[tokio::test]
    async fn empty_input_hash() {
        let mut stream = HashingStream::new(Sha512::new(), &b""[..]);
        let mut content = Vec::new();
        stream.read_to_end(&mut content).await.unwrap();
        assert_eq!(
            stream.fingerprint_hex(),
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }

    #[tokio::test]
    async fn missing_package_is_an_error() {
        let err = read_package("/nonexistent/package.tar.gz").await.unwrap_err();
        assert!(err.to_string().contains("Failed to open package"));
    }
}
