//! Built-in fixture registry.
//!
//! Descriptors for the symbolic-execution fixture suite (pointer tricks,
//! strings, recursive lists and arrays). The fixture bodies live with the
//! engine; the harness only needs their signatures.

use svmgold_core::{ExplorationMode, MethodDescriptor};

use crate::error::Result;
use crate::registry::TestRegistry;

use ExplorationMode::{NeverUnroll, SmartUnrolling};

const NS: &str = "VSharp.Test.Tests";
const INT: &str = "System.Int32";
const VOID: &str = "System.Void";
const STRING: &str = "System.String";
const LIST_NODE: &str = "VSharp.Test.Tests.ListNode";
const A: &str = "VSharp.Test.Tests.A";

const BOTH: &[ExplorationMode] = &[SmartUnrolling, NeverUnroll];
const SMART: &[ExplorationMode] = &[SmartUnrolling];
const ANY: &[ExplorationMode] = &[];

struct Fixture {
    method: &'static str,
    parameters: &'static [&'static str],
    return_type: &'static str,
    modes: &'static [ExplorationMode],
}

const fn fx(
    method: &'static str,
    parameters: &'static [&'static str],
    return_type: &'static str,
    modes: &'static [ExplorationMode],
) -> Fixture {
    Fixture {
        method,
        parameters,
        return_type,
        modes,
    }
}

const UNSAFE: &[Fixture] = &[
    fx("ChangeThroughIndirection", &[], INT, BOTH),
    fx("CharSizeOf", &[], INT, BOTH),
    fx("StrangeSizeOf", &[], INT, BOTH),
    fx("ReturnConst", &[], INT, BOTH),
    fx("DoubleIndirection", &[], INT, BOTH),
    fx("ReturnIntFromIntPtr", &[INT], INT, SMART),
    fx("SimplePointerDifference", &[INT, "System.Double"], INT, BOTH),
    fx("PointerTriangle", &[INT, INT, INT], INT, BOTH),
];

const STRINGS: &[Fixture] = &[
    fx("EmptyString", &[INT, INT], STRING, ANY),
    fx("GetConcreteHash", &[], INT, ANY),
    fx("GetSymbolicHash", &[STRING], INT, ANY),
    fx("SymbolicString", &[STRING], STRING, ANY),
    fx("NullLength", &[], INT, ANY),
    fx("HopHeyCharArray", &["System.Char[]"], STRING, ANY),
    fx("ConcreteIsInterned", &[], STRING, ANY),
    fx("ConcreteIntern", &[], STRING, ANY),
    fx("NotInterned", &[], "System.Object", ANY),
];

const LINEAR_WORKING_SAFE: &[Fixture] = &[
    fx("TestMutateRecursive", &[INT], VOID, ANY),
    fx("TestEqualFields", &[INT, INT], VOID, ANY),
    fx("TestFactorialIsGreater", &[A], VOID, ANY),
    fx("TestFieldIsGreater", &[A], VOID, ANY),
    fx("JustCallTest", &[], VOID, ANY),
    fx("CheckMc91Safe", &[INT], VOID, ANY),
    fx("TestGcdSame", &[INT], VOID, ANY),
    fx("TestGcdEqual", &[INT, INT], VOID, ANY),
    fx("TestGcdIsLess", &[INT, INT], VOID, ANY),
    fx("TestFieldsEqualRecursive", &[INT, INT], VOID, ANY),
];

const LIST_WORKING: &[Fixture] = &[
    fx("LengthPositive", &[LIST_NODE], VOID, ANY),
    fx("LengthZero", &[LIST_NODE], VOID, ANY),
    fx("LastTest", &[LIST_NODE], VOID, ANY),
    fx("TestReverseNull", &[LIST_NODE], VOID, ANY),
    fx("TestReverseOfReverse", &[LIST_NODE], VOID, ANY),
    fx("LastNodeAndReverse", &[LIST_NODE], VOID, ANY),
    fx("TestContainsLast", &[LIST_NODE], VOID, ANY),
    fx("TestLengthOfReverse", &[LIST_NODE], VOID, ANY),
    fx("TestDoubleCrop", &[LIST_NODE, INT], VOID, ANY),
    fx("TestCreate", &[INT], VOID, ANY),
    fx("ContainsDecreasing", &[INT, INT], VOID, ANY),
    fx("TestRemoveAllContains", &[LIST_NODE, INT], VOID, ANY),
    fx("TestMax", &[LIST_NODE], VOID, ANY),
    fx(
        "TestMaxContainsTree",
        &["VSharp.Test.Tests.BinTreeNode"],
        VOID,
        ANY,
    ),
];

const LISTS: &[Fixture] = &[
    fx("Construct", &[], "System.Boolean", ANY),
    fx("Mutate", &[INT], "System.Int32[]", ANY),
    fx("LowerBoundTest", &[], INT, ANY),
    fx("LowerBoundExceptionTest", &["System.Int32[,]"], INT, ANY),
    fx("LowerBoundSymbolicTest", &["System.Int32[,]", INT], INT, ANY),
    fx("UpperBoundTest", &[], INT, ANY),
    fx("RankTest", &[], INT, ANY),
    fx("RetOneDArray1", &["System.Boolean", "System.Boolean"], "System.Int32[]", ANY),
    fx("RetOneDArray2", &[INT], "System.Int32[]", ANY),
    fx("RetSystemArray1", &["System.Array"], "System.Array", ANY),
];

const GROUPS: &[(&str, &[Fixture])] = &[
    ("Unsafe", UNSAFE),
    ("Strings", STRINGS),
    ("LinearWorkingSafe", LINEAR_WORKING_SAFE),
    ("ListWorking", LIST_WORKING),
    ("Lists", LISTS),
];

/// Registry of every built-in fixture, grouped by declaring class.
pub fn builtin_registry() -> Result<TestRegistry> {
    let mut registry = TestRegistry::new();
    for (group, fixtures) in GROUPS {
        let type_name = format!("{NS}.{group}");
        for f in *fixtures {
            registry.register_method(
                group,
                MethodDescriptor::new(
                    type_name.as_str(),
                    f.method,
                    f.parameters.iter().copied(),
                    f.return_type,
                ),
                f.modes,
            )?;
        }
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_no_duplicates() {
        let registry = builtin_registry().unwrap();
        let groups = registry.groups();
        assert_eq!(groups.len(), GROUPS.len());
        assert_eq!(groups[0].name, "Unsafe");
        assert_eq!(groups[0].methods.len(), UNSAFE.len());
        assert_eq!(registry.len(), GROUPS.iter().map(|(_, f)| f.len()).sum::<usize>());
    }

    #[test]
    fn smart_only_fixture_is_gated() {
        let registry = builtin_registry().unwrap();
        let (_, method) = registry
            .iter()
            .find(|(_, m)| m.descriptor.method == "ReturnIntFromIntPtr")
            .unwrap();
        assert!(method.accepts(SmartUnrolling));
        assert!(!method.accepts(NeverUnroll));
        assert_eq!(
            method.descriptor.signature_text(),
            "System.Int32 VSharp.Test.Tests.Unsafe.ReturnIntFromIntPtr(System.Int32)"
        );
    }
}
