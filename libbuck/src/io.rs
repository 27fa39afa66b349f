use crate::error::BuckResult;
use std::io::prelude::*;

pub trait ReadExt: Read {
    fn read_u8(&mut self) -> BuckResult<u8> {
        let mut buf = [0; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> BuckResult<u16> {
        let mut buf = [0; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_u32(&mut self) -> BuckResult<u32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_u64(&mut self) -> BuckResult<u64> {
        let mut buf = [0; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    fn read_i64(&mut self) -> BuckResult<i64> {
        let mut buf = [0; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    fn read_vec(&mut self, n: usize) -> BuckResult<Vec<u8>> {
        let mut buf = vec![0; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_array<const N: usize>(&mut self) -> BuckResult<[u8; N]> {
        let mut buf = [0; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<R: Read + ?Sized> ReadExt for R {
}

pub trait WriteExt: Write {
    fn write_u8(&mut self, n: u8) -> BuckResult<()> {
        self.write_all(&[n])?;
        Ok(())
    }

    fn write_u16(&mut self, n: u16) -> BuckResult<()> {
        self.write_all(&n.to_be_bytes())?;
        Ok(())
    }

    fn write_u32(&mut self, n: u32) -> BuckResult<()> {
        self.write_all(&n.to_be_bytes())?;
        Ok(())
    }

    fn write_u64(&mut self, n: u64) -> BuckResult<()> {
        self.write_all(&n.to_be_bytes())?;
        Ok(())
    }

    fn write_i64(&mut self, n: i64) -> BuckResult<()> {
        self.write_all(&n.to_be_bytes())?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteExt for W {
}
