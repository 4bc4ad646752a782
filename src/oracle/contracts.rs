// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Oracle and consumer contract bindings.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IFunctionsOracle {
        event UserCallbackError(bytes32 indexed requestId, string reason);
        event UserCallbackRawError(bytes32 indexed requestId, bytes lowLevelData);

        function getDONPublicKey() external view returns (bytes memory);
        function getAllNodePublicKeys() external view returns (address[] memory, bytes[] memory);
    }
}

sol! {
    #[sol(rpc)]
    interface ITrackingConsumer {
        event RequestSent(bytes32 indexed id);
        event OCRResponse(bytes32 indexed requestId, bytes result, bytes err);

        function executeRequest(
            string calldata source,
            bytes calldata secrets,
            string[] calldata args,
            uint64 subscriptionId,
            uint32 gasLimit
        ) external returns (bytes32);
    }
}
