/// Implements `Copy`, field-array conversions and (with the `unsafe` feature) slice views
/// for a `repr(C)` struct whose fields all have the type `$type_param`.
#[macro_export]
macro_rules! impl_uniform_struct {
    ($type_name:ident, $type_param:ident, $count:literal, [$($field:ident),+]) => {
        impl<$type_param> Copy for $type_name<$type_param> where $type_param: Copy {}

        impl<$type_param> $type_name<$type_param> {
            /// Constructs an instance from its fields in declaration order.
            #[inline(always)]
            pub fn from_fields(fields: [$type_param; $count]) -> Self {
                let [$($field),+] = fields;
                Self { $($field),+ }
            }

            /// Returns the fields in declaration order.
            #[inline(always)]
            pub fn fields(self) -> [$type_param; $count] {
                [$(self.$field),+]
            }
        }

        #[cfg_attr(docsrs, doc(cfg(feature = "unsafe")))]
        #[cfg(feature = "unsafe")]
        impl<$type_param> $type_name<$type_param> {
            /// Views a slice of exactly the struct's length as the struct.
            #[allow(unused)]
            #[inline]
            pub fn from_slice(slice: &[$type_param]) -> &Self {
                assert_eq!(slice.len(), $count);

                // SAFETY: $type_name only contains `$type_param` fields and is `repr(C)`
                unsafe { &*(slice.as_ptr() as *const Self) }
            }
        }

        #[cfg_attr(docsrs, doc(cfg(feature = "unsafe")))]
        #[cfg(feature = "unsafe")]
        impl<$type_param> core::convert::AsRef<[$type_param]> for $type_name<$type_param> {
            fn as_ref(&self) -> &[$type_param] {
                // SAFETY: $type_name only contains `$type_param` fields and is `repr(C)`
                unsafe { core::slice::from_raw_parts(self as *const _ as *const $type_param, $count) }
            }
        }

        #[cfg(test)]
        paste::paste! {
            #[cfg(test)]
            mod [<tests_gen_ $type_name:lower>] {
                use super::*;

                #[test]
                fn test_array_conversion() {
                    let mut data = [0_u32; $count];
                    for (i, value) in data.iter_mut().enumerate() {
                        *value = i as u32 + 1;
                    }
                    let converted = $type_name::from_fields(data);
                    assert_eq!(converted.fields(), data);
                }

                #[test]
                #[cfg(feature = "unsafe")]
                fn test_from_slice() {
                    let data = [7_u32; $count + 1];
                    let view = $type_name::from_slice(&data[..$count]);
                    assert!(core::ptr::eq(view.as_ref().as_ptr(), data.as_ptr()));
                }
            }
        }
    };
}
