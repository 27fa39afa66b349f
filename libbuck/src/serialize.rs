use crate::error::BuckResult;
use std::io::prelude::*;
use std::io::BufReader;

pub trait Serialize {
    fn serialize(&self, writer: &mut dyn Write) -> BuckResult<()>;

    fn serialize_to_vec(&self) -> BuckResult<Vec<u8>> {
        let mut buf = vec![];
        self.serialize(&mut buf)?;
        Ok(buf)
    }
}

pub trait Deserialize {
    fn deserialize(reader: &mut impl BufRead) -> BuckResult<Self>
    where
        Self: Sized;

    fn deserialize_unbuffered(reader: impl Read) -> BuckResult<Self>
    where
        Self: Sized,
    {
        Self::deserialize(&mut BufReader::new(reader))
    }
}
