use std::io::{self, Chain, Cursor, Read};

use flate2::read::MultiGzDecoder;
use tracing::debug;

/// The first two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

type Rewound<R> = Chain<Cursor<Vec<u8>>, R>;

/// A reader that transparently decompresses its input if it starts with the
/// gzip magic bytes and passes it through unchanged otherwise
pub enum AutoGunzip<R: Read> {
    Plain(Rewound<R>),
    Gzip(MultiGzDecoder<Rewound<R>>),
}

impl<R: Read> AutoGunzip<R> {
    /// Sniffs the first bytes of `inner` and wraps it accordingly. The
    /// sniffed bytes are put back in front of the stream.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let mut magic = [0u8; 2];
        let mut len = 0;
        while len < magic.len() {
            match inner.read(&mut magic[len..]) {
                Ok(0) => break,
                Ok(n) => len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        let rewound = Cursor::new(magic[..len].to_vec()).chain(inner);
        if magic[..len] == GZIP_MAGIC {
            debug!("input is gzip-compressed");
            Ok(AutoGunzip::Gzip(MultiGzDecoder::new(rewound)))
        } else {
            Ok(AutoGunzip::Plain(rewound))
        }
    }

    /// Returns `true` if the input is being decompressed
    pub fn is_gzip(&self) -> bool {
        matches!(self, AutoGunzip::Gzip(_))
    }
}

impl<R: Read> Read for AutoGunzip<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            AutoGunzip::Plain(r) => r.read(buf),
            AutoGunzip::Gzip(r) => r.read(buf),
        }
    }
}
