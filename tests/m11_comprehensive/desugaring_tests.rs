//! Facade→Substrate Desugaring Tests
//!
//! Tests verifying that the facade is a true lossless projection of the substrate.
//!
//! Test ID Conventions:
//! - DS-KV-xxx: KV desugaring parity
//! - DS-JS-xxx: JSON desugaring parity
//! - DS-ERR-xxx: Error propagation tests
//! - DS-INV-xxx: Invariant verification

use crate::test_utils::*;

// =============================================================================
// 5.1 KV Desugaring Parity Tests (DS-KV-001 to DS-KV-008)
// =============================================================================

#[cfg(test)]
mod kv_desugaring {
    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_kv_001_set_desugars() {
        // set(k, v) -> begin(); kv_put(default, k, v); commit()
        // Both should produce same state
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_kv_002_get_desugars() {
        // get(k) -> kv_get(default, k).map(|v| v.value)
        // Both should produce same result
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_kv_003_getv_desugars() {
        // getv(k) -> kv_get(default, k)
        // Should be identical
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_kv_004_mget_desugars() {
        // mget([k1,k2]) -> [kv_get(default,k1), kv_get(default,k2)]
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_kv_005_mset_desugars() {
        // mset([(k1,v1),(k2,v2)]) -> begin(); kv_put(..); kv_put(..); commit()
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_kv_006_delete_desugars() {
        // delete([k]) -> begin(); kv_delete(default,k); commit()
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_kv_007_exists_desugars() {
        // exists(k) -> kv_get(default,k).is_some()
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_kv_008_incr_desugars() {
        // incr(k, d) -> kv_incr(default, k, d)
    }
}

// =============================================================================
// 5.2 JSON Desugaring Parity Tests (DS-JS-001 to DS-JS-005)
// =============================================================================

#[cfg(test)]
mod json_desugaring {
    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_js_001_json_set_desugars() {
        // json_set(k, p, v) -> begin(); json_set(default, k, p, v); commit()
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_js_002_json_get_desugars() {
        // json_get(k, p) -> json_get(default, k, p).map(|v| v.value)
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_js_003_json_getv_desugars() {
        // json_getv(k, p) -> json_get(default, k, p)
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_js_004_json_del_desugars() {
        // json_del(k, p) -> begin(); json_delete(default, k, p); commit()
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_js_005_json_merge_desugars() {
        // json_merge(k, p, v) -> begin(); json_merge(default, k, p, v); commit()
    }
}

// =============================================================================
// 5.3 Error Propagation Tests (DS-ERR-001 to DS-ERR-005)
// =============================================================================

#[cfg(test)]
mod error_propagation {
    use super::*;

    #[test]
    fn ds_err_error_codes_match() {
        // Verify error codes are consistent between layers
        let errors = vec![
            StrataError::NotFound { key: "k".into() },
            StrataError::WrongType { expected: "int", actual: "string" },
            StrataError::InvalidKey { key: "".into(), reason: "empty".into() },
            StrataError::ConstraintViolation { reason: "test".into() },
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.error_code()).collect();
        assert_eq!(codes, vec!["NotFound", "WrongType", "InvalidKey", "ConstraintViolation"]);
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_err_001_facade_propagates_invalid_key() {
        // set("", v) -> Same InvalidKey as substrate
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_err_002_facade_propagates_wrong_type() {
        // incr on string -> Same WrongType as substrate
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_err_003_facade_propagates_constraint() {
        // Set too-large value -> Same ConstraintViolation
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_err_004_no_error_swallowing() {
        // Any substrate error surfaces unchanged through facade
    }

    #[test]
    #[ignore = "Requires facade/substrate implementation"]
    fn ds_err_005_error_details_preserved() {
        // Error details match between facade and substrate
    }
}

// =============================================================================
// 5.4 Invariant Verification Tests
// =============================================================================

#[cfg(test)]
mod invariants {
    #[test]
    fn ds_inv_fac_1_concept() {
        // FAC-1: Every facade op maps to substrate
        // This is verified by the desugaring tests above
    }

    #[test]
    fn ds_inv_fac_2_concept() {
        // FAC-2: No new semantics
        // Facade result = substrate result
    }

    #[test]
    fn ds_inv_fac_3_concept() {
        // FAC-3: No hidden errors
        // All errors surface
    }

    #[test]
    fn ds_inv_fac_4_concept() {
        // FAC-4: No reordering
        // Operation order preserved
    }

    #[test]
    fn ds_inv_fac_5_concept() {
        // FAC-5: Traceable behavior
        // No magic
    }
}
