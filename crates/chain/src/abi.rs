use alloy::sol;

// ─── DutchBasar (ERC-721 Dutch auction) ─────────────────────────────────────
sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract DutchBasar {
        // === Auction lifecycle events ===
        event AuctionConfigured(
            uint256 startPrice,
            uint256 endPrice,
            uint256 startTime,
            uint256 endTime,
            uint256 priceDecayRate
        );
        event AllowlistConfigured(bytes32 merkleRoot, uint256 maxPerWallet);
        event PhaseChanged(uint8 newPhase);
        event Minted(
            address indexed to,
            uint256 indexed tokenId,
            uint256 quantity,
            uint256 price,
            uint8 phase
        );
        event Revealed(bytes32 provenanceHash);
        event RoyaltyUpdated(address indexed receiver, uint96 feeNumerator);
        event FundsWithdrawn(address indexed to, uint256 amount);

        // === ERC-721 core events ===
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
        event Approval(address indexed owner, address indexed approved, uint256 indexed tokenId);
        event ApprovalForAll(address indexed owner, address indexed operator, bool approved);

        // === Metadata view functions ===
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function owner() external view returns (address);
        function maxSupply() external view returns (uint256);
    }
}
