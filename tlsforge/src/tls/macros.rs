/// A macro which defines an enum type backed by a wire integer. Values without a name are kept
/// in `Unknown`, so that every byte sequence can be represented and re-encoded.
macro_rules! enum_builder {
    (
        @U8
        $(#[$comment:meta])*
        EnumName: $enum_name:ident;
        EnumVal { $( $enum_var:ident => $enum_val:literal ),* $(,)? }
    ) => {
        $(#[$comment])*
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $enum_name {
            $( $enum_var ),*
            ,Unknown(u8)
        }

        impl $enum_name {
            pub fn get_u8(&self) -> u8 {
                match *self {
                    $( $enum_name::$enum_var => $enum_val ),*
                    ,$enum_name::Unknown(x) => x
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $enum_name::Unknown(_))
            }
        }

        impl From<u8> for $enum_name {
            fn from(x: u8) -> Self {
                match x {
                    $( $enum_val => $enum_name::$enum_var ),*
                    ,x => $enum_name::Unknown(x),
                }
            }
        }

        impl forge::codec::Codec for $enum_name {
            fn encode(&self, bytes: &mut Vec<u8>) {
                bytes.push(self.get_u8());
            }

            fn read(r: &mut forge::codec::Reader) -> Result<Self, forge::codec::DecodeError> {
                r.read_u8().map($enum_name::from)
            }
        }
    };
    (
        @U16
        $(#[$comment:meta])*
        EnumName: $enum_name:ident;
        EnumVal { $( $enum_var:ident => $enum_val:literal ),* $(,)? }
    ) => {
        $(#[$comment])*
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $enum_name {
            $( $enum_var ),*
            ,Unknown(u16)
        }

        impl $enum_name {
            pub fn get_u16(&self) -> u16 {
                match *self {
                    $( $enum_name::$enum_var => $enum_val ),*
                    ,$enum_name::Unknown(x) => x
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $enum_name::Unknown(_))
            }
        }

        impl From<u16> for $enum_name {
            fn from(x: u16) -> Self {
                match x {
                    $( $enum_val => $enum_name::$enum_var ),*
                    ,x => $enum_name::Unknown(x),
                }
            }
        }

        impl forge::codec::Codec for $enum_name {
            fn encode(&self, bytes: &mut Vec<u8>) {
                bytes.extend_from_slice(&self.get_u16().to_be_bytes());
            }

            fn read(r: &mut forge::codec::Reader) -> Result<Self, forge::codec::DecodeError> {
                r.read_u16().map($enum_name::from)
            }
        }
    };
}
