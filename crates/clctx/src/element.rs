use std::{
    fmt, ops::{BitAnd, BitOr}
};

/// Fixed-width element types a [`Buffer`](crate::Buffer) can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    U8,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ElementType {
    pub fn size_bytes(&self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 => 8,
        }
    }

    /// Name of the matching OpenCL C scalar type.
    pub fn cl_name(&self) -> &'static str {
        match self {
            ElementType::U8 => "uchar",
            ElementType::I32 => "int",
            ElementType::U32 => "uint",
            ElementType::I64 => "long",
            ElementType::U64 => "ulong",
            ElementType::F32 => "float",
            ElementType::F64 => "double",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cl_name())
    }
}

/// Plain-old-data element that can be copied to and from device memory byte for byte.
pub trait BufferElement: bytemuck::Pod + Default + 'static {
    const ELEMENT: ElementType;
}

macro_rules! buffer_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(impl BufferElement for $ty {
            const ELEMENT: ElementType = ElementType::$tag;
        })*
    };
}

buffer_element! {
    u8 => U8,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

/// Access flags for device memory objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemFlags(u32);

impl MemFlags {
    pub const DEVICE_READ: Self = Self(1 << 0);
    pub const DEVICE_WRITE: Self = Self(1 << 1);
    pub const HOST_READ: Self = Self(1 << 2);
    pub const HOST_WRITE: Self = Self(1 << 3);

    const HOST: u32 = Self::HOST_READ.0 | Self::HOST_WRITE.0;

    pub const READ_WRITE: Self = Self(Self::DEVICE_READ.0 | Self::DEVICE_WRITE.0 | Self::HOST);
    /// Kernels read, the host uploads.
    pub const READ_ONLY: Self = Self(Self::DEVICE_READ.0 | Self::HOST);
    /// Kernels write, the host downloads.
    pub const WRITE_ONLY: Self = Self(Self::DEVICE_WRITE.0 | Self::HOST);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn device_readable(self) -> bool {
        self.contains(MemFlags::DEVICE_READ)
    }

    #[inline]
    pub fn device_writable(self) -> bool {
        self.contains(MemFlags::DEVICE_WRITE)
    }
}

impl BitOr for MemFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for MemFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Default for MemFlags {
    fn default() -> Self {
        MemFlags::READ_WRITE
    }
}
