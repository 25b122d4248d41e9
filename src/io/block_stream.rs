//! Chunked async block streaming.
//!
//! [`BlockStream`] pulls byte chunks from an async source, buffers partial
//! blocks, and emits whole blocks as they complete: a
//! [`Error::BufferUnderflow`] from the framer means "wait for more input",
//! any other error aborts the stream. Chunk boundaries are arbitrary:
//! one byte at a time decodes the same blocks as one mega-chunk.
//!
//! [`BlockSink`] is the encoding side: pre-built blocks pass through one
//! block per call, row input is transposed into blocks of a configured
//! size.

use crate::binary::Reader;
use crate::block::{
    decode_block,
    encode_block,
    end_marker,
    Block,
    SchemaColumn,
};
use crate::codec::{
    get_codec,
    CodecRef,
    DecodeOptions,
};
use crate::value::Value;
use crate::{
    Error,
    Result,
};
use bytes::{
    Buf,
    BytesMut,
};
use tokio::io::{
    AsyncRead,
    AsyncReadExt,
    AsyncWrite,
    AsyncWriteExt,
};

/// Default rows per block when transposing row input.
pub const DEFAULT_BLOCK_SIZE: usize = 65536;

const READ_CHUNK: usize = 8192;

enum Step {
    Emit(Block, usize),
    Skip(usize),
    NeedInput,
}

/// Streaming block decoder over any async byte source.
pub struct BlockStream<R> {
    reader: R,
    buffer: BytesMut,
    options: DecodeOptions,
    eof: bool,
}

impl<R: AsyncRead + Unpin> BlockStream<R> {
    /// Create a stream with default options.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecodeOptions::default())
    }

    /// Create a stream with explicit decode options.
    pub fn with_options(reader: R, options: DecodeOptions) -> Self {
        Self { reader, buffer: BytesMut::new(), options, eof: false }
    }

    /// The next whole block, or `None` once the source is exhausted.
    ///
    /// End-marker blocks are consumed and skipped; they do not terminate
    /// the stream. Bytes left over after the source ends are an error.
    pub async fn next_block(&mut self) -> Result<Option<Block>> {
        loop {
            let step = if self.buffer.is_empty() {
                Step::NeedInput
            } else {
                let mut r = Reader::new(&self.buffer);
                match decode_block(&mut r, &self.options) {
                    Ok(Some(block)) => Step::Emit(block, r.position()),
                    Ok(None) => Step::Skip(r.position()),
                    Err(Error::BufferUnderflow { .. }) => Step::NeedInput,
                    Err(e) => return Err(e),
                }
            };

            match step {
                Step::Emit(block, used) => {
                    self.buffer.advance(used);
                    tracing::debug!(
                        columns = block.column_count(),
                        rows = block.row_count(),
                        bytes = used,
                        "decoded block"
                    );
                    return Ok(Some(block));
                }
                Step::Skip(used) => {
                    self.buffer.advance(used);
                }
                Step::NeedInput => {
                    if self.eof {
                        if self.buffer.is_empty() {
                            return Ok(None);
                        }
                        return Err(Error::Protocol(format!(
                            "stream ended inside a block ({} bytes buffered)",
                            self.buffer.len()
                        )));
                    }
                    let mut chunk = [0u8; READ_CHUNK];
                    let n = self.reader.read(&mut chunk).await?;
                    if n == 0 {
                        self.eof = true;
                    } else {
                        self.buffer.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    }

    /// Drain the stream into a vector of blocks.
    pub async fn collect(mut self) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        while let Some(block) = self.next_block().await? {
            blocks.push(block);
        }
        Ok(blocks)
    }
}

/// Streaming block encoder over any async byte sink.
pub struct BlockSink<W> {
    writer: W,
    schema: Vec<SchemaColumn>,
    codecs: Vec<CodecRef>,
    block_size: usize,
    pending: Vec<Vec<Value>>,
    pending_rows: usize,
}

impl<W: AsyncWrite + Unpin> BlockSink<W> {
    /// Create a sink for the given schema.
    pub fn new(writer: W, schema: &[SchemaColumn]) -> Result<Self> {
        let codecs = schema
            .iter()
            .map(|col| get_codec(&col.ty))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            writer,
            schema: schema.to_vec(),
            codecs,
            block_size: DEFAULT_BLOCK_SIZE,
            pending: vec![Vec::new(); schema.len()],
            pending_rows: 0,
        })
    }

    /// Override the rows-per-block threshold for row input.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Encode and write one pre-built block (no re-batching).
    pub async fn write_block(&mut self, block: &Block) -> Result<()> {
        let bytes = encode_block(block)?;
        self.writer.write_all(&bytes).await?;
        Ok(())
    }

    /// Buffer rows, flushing one block per `block_size` rows.
    pub async fn write_rows<I>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        for row in rows {
            if row.len() != self.schema.len() {
                return Err(Error::LengthMismatch {
                    what: format!("row {}", self.pending_rows),
                    expected: self.schema.len(),
                    got: row.len(),
                });
            }
            for (slot, value) in self.pending.iter_mut().zip(row) {
                slot.push(value);
            }
            self.pending_rows += 1;
            if self.pending_rows >= self.block_size {
                self.flush_rows().await?;
            }
        }
        Ok(())
    }

    /// Flush buffered rows as one block, if any.
    pub async fn flush_rows(&mut self) -> Result<()> {
        if self.pending_rows == 0 {
            return Ok(());
        }
        let mut block = Block::new();
        for ((schema, codec), values) in self
            .schema
            .iter()
            .zip(self.codecs.iter())
            .zip(self.pending.iter_mut())
        {
            let data = codec.from_values(values)?;
            values.clear();
            block.append_column(&schema.name, &schema.ty, data)?;
        }
        self.pending_rows = 0;
        let bytes = encode_block(&block)?;
        self.writer.write_all(&bytes).await?;
        Ok(())
    }

    /// Flush pending rows, write the end marker, and return the writer.
    pub async fn finish(mut self) -> Result<W> {
        self.flush_rows().await?;
        self.writer.write_all(&end_marker()).await?;
        self.writer.flush().await?;
        Ok(self.writer)
    }
}
