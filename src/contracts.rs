use ethers::contract::abigen;

// Registry ("singleton") that computes the counterfactual address of an account from its
// init code. Only needed when an operation deploys the account and no target is given.
abigen!(
    Singleton,
    r#"[
        function getAccountAddress(bytes initCode, uint256 salt) view returns (address)
    ]"#
);

// Nonce getter exposed by the test accounts.
abigen!(
    SmartAccount,
    r#"[
        function nonce() view returns (uint256)
    ]"#
);
