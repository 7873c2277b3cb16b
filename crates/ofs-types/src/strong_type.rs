/// Declares a newtype identifier over a primitive integer.
///
/// The generated type is `Copy`, totally ordered, hashable, serializes as
/// the bare integer, derefs to the inner value and converts both ways with
/// `From`. `Debug` prints `Name(value)`, `Display` prints only the value.
#[macro_export]
macro_rules! strong_type {
    ($name:ident, $inner:ty) => {
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Default,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Wrap a raw value.
            #[inline]
            pub const fn new(raw: $inner) -> Self {
                Self(raw)
            }

            /// Return the raw value.
            #[inline]
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $inner;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(val: $inner) -> Self {
                Self(val)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(val: $name) -> Self {
                val.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    strong_type!(DatafileNo, u32);

    #[test]
    fn test_new_and_get() {
        let no = DatafileNo::new(3);
        assert_eq!(no.get(), 3);
        assert_eq!(*no, 3);
    }

    #[test]
    fn test_conversions() {
        let no: DatafileNo = 7u32.into();
        let raw: u32 = no.into();
        assert_eq!(raw, 7);
    }

    #[test]
    fn test_display_debug() {
        let no = DatafileNo(12);
        assert_eq!(no.to_string(), "12");
        assert_eq!(format!("{:?}", no), "DatafileNo(12)");
    }

    #[test]
    fn test_ordered_set() {
        let set: BTreeSet<_> = [DatafileNo(2), DatafileNo(0), DatafileNo(2)].into();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![DatafileNo(0), DatafileNo(2)]);
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&DatafileNo(5)).unwrap();
        assert_eq!(json, "5");
        let parsed: DatafileNo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, DatafileNo(5));
    }
}
